//! Whitelisted profile updates rendered to a parameterised `UPDATE`.

use rusqlite::types::Value;

/// The only user columns an update may touch. Column names are fixed here and never
/// taken from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatableField {
    FirstName,
    LastName,
    PhoneNumber,
    PasswordHash,
}

impl UpdatableField {
    pub fn column(self) -> &'static str {
        match self {
            UpdatableField::FirstName => "first_name",
            UpdatableField::LastName => "last_name",
            UpdatableField::PhoneNumber => "phone_number",
            UpdatableField::PasswordHash => "password_hash",
        }
    }
}

/// Builder for a whitelisted user update. Setting a field twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    fields: Vec<(UpdatableField, String)>,
}

impl UserUpdate {
    pub fn new() -> Self { Self::default() }

    pub fn first_name(self, v: impl Into<String>) -> Self { self.set(UpdatableField::FirstName, v.into()) }
    pub fn last_name(self, v: impl Into<String>) -> Self { self.set(UpdatableField::LastName, v.into()) }
    pub fn phone_number(self, v: impl Into<String>) -> Self { self.set(UpdatableField::PhoneNumber, v.into()) }
    pub fn password_hash(self, v: impl Into<String>) -> Self { self.set(UpdatableField::PasswordHash, v.into()) }

    fn set(mut self, field: UpdatableField, value: String) -> Self {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn fields(&self) -> impl Iterator<Item = UpdatableField> + '_ {
        self.fields.iter().map(|(f, _)| *f)
    }

    /// `UPDATE` statement with positional parameters; the row id binds last.
    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        let assignments: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, (f, _))| format!("{} = ?{}", f.column(), i + 1))
            .collect();
        let sql = format!("UPDATE users SET {} WHERE id = ?{}", assignments.join(", "), self.fields.len() + 1);
        let params = self.fields.iter().map(|(_, v)| Value::Text(v.clone())).collect();
        (sql, params)
    }
}
