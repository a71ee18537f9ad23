use crate::types::{Parameters, Value};

/// Assembles SQL text and its ordered parameter list.
///
/// Values become `?` placeholders appended to the parameter list in
/// left-to-right order. Identifiers are quoted into the text directly, since
/// they cannot be bound as data.
///
/// # Example
/// ```
/// use rowflow::{SqlTemplate, Value};
///
/// let (sql, params) = SqlTemplate::new("SELECT * FROM ")
///     .identifier("users")
///     .sql(" WHERE name = ")
///     .value("John")
///     .build();
/// assert_eq!(sql, r#"SELECT * FROM "users" WHERE name = ?"#);
/// assert_eq!(params, vec![Some(Value::from("John"))]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlTemplate {
    sql: String,
    params: Parameters,
}

impl SqlTemplate {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append literal SQL text.
    pub fn sql(mut self, text: &str) -> Self {
        self.sql.push_str(text);
        self
    }

    /// Append a placeholder bound to `value`.
    pub fn value<V: Into<Value>>(self, value: V) -> Self {
        self.nullable(Some(value))
    }

    /// Append a placeholder bound to `value`, or NULL.
    pub fn nullable<V: Into<Value>>(mut self, value: Option<V>) -> Self {
        self.sql.push('?');
        self.params.push(value.map(Into::into));
        self
    }

    /// Append a comma-separated placeholder list, one per value.
    pub fn values<V, I>(mut self, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = Option<V>>,
    {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self = self.nullable(value);
        }
        self
    }

    /// Append a quoted identifier.
    pub fn identifier(mut self, name: &str) -> Self {
        self.sql.push_str(&quote_identifier(name));
        self
    }

    /// Append a comma-separated list of quoted identifiers.
    pub fn identifiers<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push_str(&quote_identifier(name));
        }
        self
    }

    /// Build the SQL string and parameters.
    pub fn build(self) -> (String, Parameters) {
        (self.sql, self.params)
    }
}

/// Quote an identifier with double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `n` comma-separated positional placeholders.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
