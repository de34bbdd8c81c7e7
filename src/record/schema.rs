//! Table schemas
//!
//! A schema is an ordered list of named, typed fields. Field order is
//! significant: rows store their values positionally, and join outputs are
//! the concatenation of their input schemas.

/// The type of a field: integer or fixed-capacity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 32-bit signed integer
    Int,
    /// String with the given maximum length
    Varchar(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldDef {
    name: String,
    ftype: FieldType,
}

/// An ordered collection of field definitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field with the given type.
    ///
    /// Adding a field that already exists is a no-op; join schemas are
    /// built by unioning inputs and the first definition wins.
    pub fn add_field(&mut self, name: impl Into<String>, ftype: FieldType) {
        let name = name.into();
        if !self.has_field(&name) {
            self.fields.push(FieldDef { name, ftype });
        }
    }

    /// Adds an integer field
    pub fn add_int_field(&mut self, name: impl Into<String>) {
        self.add_field(name, FieldType::Int);
    }

    /// Adds a string field with the given maximum length
    pub fn add_string_field(&mut self, name: impl Into<String>, len: usize) {
        self.add_field(name, FieldType::Varchar(len));
    }

    /// Adds every field of the other schema to this one
    pub fn add_all(&mut self, other: &Schema) {
        for f in &other.fields {
            self.add_field(f.name.clone(), f.ftype);
        }
    }

    /// Returns true if the schema contains the named field
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Returns the positional index of the named field
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the type of the named field
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.ftype)
    }

    /// Returns the field names in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_preserved() {
        let mut sch = Schema::new();
        sch.add_int_field("b");
        sch.add_string_field("a", 10);
        sch.add_int_field("c");

        let names: Vec<&str> = sch.fields().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(sch.index_of("a"), Some(1));
        assert_eq!(sch.field_type("b"), Some(FieldType::Int));
    }

    #[test]
    fn test_add_all_unions() {
        let mut s1 = Schema::new();
        s1.add_int_field("x");
        let mut s2 = Schema::new();
        s2.add_int_field("x");
        s2.add_int_field("y");

        let mut joined = Schema::new();
        joined.add_all(&s1);
        joined.add_all(&s2);

        assert_eq!(joined.len(), 2);
        assert!(joined.has_field("x"));
        assert!(joined.has_field("y"));
    }
}
