//! Entity registry: every profile table the API exposes, keyed by [`ModelName`].
//!
//! Handlers and the eraser never index tables by free-form strings; a path
//! segment is parsed into a `ModelName` first and the descriptor is looked up
//! from that.

use std::fmt;

/// Logical entity behind a path segment such as `/admin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelName {
    Admin,
    Doctor,
    Patient,
}

impl ModelName {
    pub const ALL: [ModelName; 3] = [ModelName::Admin, ModelName::Doctor, ModelName::Patient];

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "admin" => Some(ModelName::Admin),
            "doctor" => Some(ModelName::Doctor),
            "patient" => Some(ModelName::Patient),
            _ => None,
        }
    }

    pub fn path_segment(self) -> &'static str {
        match self {
            ModelName::Admin => "admin",
            ModelName::Doctor => "doctor",
            ModelName::Patient => "patient",
        }
    }

    /// Human label used in messages ("Admin not found").
    pub fn label(self) -> &'static str {
        match self {
            ModelName::Admin => "Admin",
            ModelName::Doctor => "Doctor",
            ModelName::Patient => "Patient",
        }
    }

    pub fn table(self) -> &'static EntityTable {
        match self {
            ModelName::Admin => &ADMINS,
            ModelName::Doctor => &DOCTORS,
            ModelName::Patient => &PATIENTS,
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Storage type of a column; drives bind types, row decoding and query-string parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Integer,
    Boolean,
    Timestamp,
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Included in `searchTerm` ILIKE matching.
    pub searchable: bool,
    /// Usable as an exact-match query filter.
    pub filterable: bool,
    /// Accepted in PATCH bodies.
    pub updatable: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        ColumnDef {
            name,
            kind,
            searchable: false,
            filterable: false,
            updatable: false,
        }
    }

    const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    const fn updatable(mut self) -> Self {
        self.updatable = true;
        self
    }
}

/// How a profile row points at its owning `users` row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReferenceField {
    /// `record.email = users.email`
    #[default]
    Email,
    /// `record.user_id = users.id`
    UserId,
}

impl ReferenceField {
    pub fn record_column(self) -> &'static str {
        match self {
            ReferenceField::Email => "email",
            ReferenceField::UserId => "user_id",
        }
    }

    pub fn user_column(self) -> &'static str {
        match self {
            ReferenceField::Email => "email",
            ReferenceField::UserId => "id",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            ReferenceField::Email => ColumnKind::Text,
            ReferenceField::UserId => ColumnKind::Uuid,
        }
    }
}

/// Descriptor of one profile table. Identifiers here are the only ones ever
/// interpolated into SQL.
#[derive(Debug)]
pub struct EntityTable {
    pub model: ModelName,
    pub table_name: &'static str,
    pub pk_column: &'static str,
    pub deleted_flag: &'static str,
    pub columns: &'static [ColumnDef],
    pub reference: ReferenceField,
}

impl EntityTable {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn searchable_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.searchable)
    }

    pub fn updatable_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.updatable)
    }
}

const ADMIN_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid).filterable(),
    ColumnDef::new("name", ColumnKind::Text).searchable().updatable(),
    ColumnDef::new("email", ColumnKind::Text).searchable().filterable(),
    ColumnDef::new("profile_photo", ColumnKind::Text).updatable(),
    ColumnDef::new("contact_number", ColumnKind::Text).searchable().filterable().updatable(),
    ColumnDef::new("is_deleted", ColumnKind::Boolean),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
    ColumnDef::new("updated_at", ColumnKind::Timestamp),
];

const DOCTOR_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid).filterable(),
    ColumnDef::new("name", ColumnKind::Text).searchable().updatable(),
    ColumnDef::new("email", ColumnKind::Text).searchable().filterable(),
    ColumnDef::new("profile_photo", ColumnKind::Text).updatable(),
    ColumnDef::new("contact_number", ColumnKind::Text).searchable().filterable().updatable(),
    ColumnDef::new("address", ColumnKind::Text).updatable(),
    ColumnDef::new("registration_number", ColumnKind::Text).filterable(),
    ColumnDef::new("experience", ColumnKind::Integer).filterable().updatable(),
    ColumnDef::new("gender", ColumnKind::Text).filterable().updatable(),
    ColumnDef::new("appointment_fee", ColumnKind::Integer).filterable().updatable(),
    ColumnDef::new("qualification", ColumnKind::Text).searchable().updatable(),
    ColumnDef::new("current_working_place", ColumnKind::Text).updatable(),
    ColumnDef::new("designation", ColumnKind::Text).searchable().updatable(),
    ColumnDef::new("is_deleted", ColumnKind::Boolean),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
    ColumnDef::new("updated_at", ColumnKind::Timestamp),
];

const PATIENT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid).filterable(),
    ColumnDef::new("name", ColumnKind::Text).searchable().updatable(),
    ColumnDef::new("email", ColumnKind::Text).searchable().filterable(),
    ColumnDef::new("profile_photo", ColumnKind::Text).updatable(),
    ColumnDef::new("contact_number", ColumnKind::Text).searchable().filterable().updatable(),
    ColumnDef::new("address", ColumnKind::Text).updatable(),
    ColumnDef::new("is_deleted", ColumnKind::Boolean),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
    ColumnDef::new("updated_at", ColumnKind::Timestamp),
];

static ADMINS: EntityTable = EntityTable {
    model: ModelName::Admin,
    table_name: "admins",
    pk_column: "id",
    deleted_flag: "is_deleted",
    columns: ADMIN_COLUMNS,
    reference: ReferenceField::Email,
};

static DOCTORS: EntityTable = EntityTable {
    model: ModelName::Doctor,
    table_name: "doctors",
    pk_column: "id",
    deleted_flag: "is_deleted",
    columns: DOCTOR_COLUMNS,
    reference: ReferenceField::Email,
};

static PATIENTS: EntityTable = EntityTable {
    model: ModelName::Patient,
    table_name: "patients",
    pk_column: "id",
    deleted_flag: "is_deleted",
    columns: PATIENT_COLUMNS,
    reference: ReferenceField::Email,
};

/// Registry bound to the Postgres schema holding the tables.
#[derive(Clone, Debug)]
pub struct EntityModel {
    schema: String,
}

impl EntityModel {
    pub fn new(schema: impl Into<String>) -> Self {
        EntityModel { schema: schema.into() }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn entity(&self, model: ModelName) -> &'static EntityTable {
        model.table()
    }

    pub fn entity_by_path(&self, segment: &str) -> Option<&'static EntityTable> {
        ModelName::from_path_segment(segment).map(ModelName::table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_round_trip_through_the_registry() {
        for model in ModelName::ALL {
            assert_eq!(ModelName::from_path_segment(model.path_segment()), Some(model));
            assert_eq!(model.table().model, model);
        }
        assert_eq!(ModelName::from_path_segment("users"), None);
    }

    #[test]
    fn every_table_has_the_columns_the_eraser_relies_on() {
        for model in ModelName::ALL {
            let table = model.table();
            assert!(table.column(table.pk_column).is_some(), "{model} pk");
            assert_eq!(table.column(table.deleted_flag).map(|c| c.kind), Some(ColumnKind::Boolean));
            assert!(table.column(table.reference.record_column()).is_some(), "{model} reference");
        }
    }

    #[test]
    fn identity_and_audit_columns_are_never_updatable() {
        for model in ModelName::ALL {
            let names: Vec<_> = model.table().updatable_columns().map(|c| c.name).collect();
            for locked in ["id", "email", "is_deleted", "created_at", "updated_at"] {
                assert!(!names.contains(&locked), "{model}.{locked} must not be updatable");
            }
        }
    }

    #[test]
    fn reference_field_defaults_to_email() {
        let reference = ReferenceField::default();
        assert_eq!(reference.record_column(), "email");
        assert_eq!(reference.user_column(), "email");
        assert_eq!(ReferenceField::UserId.user_column(), "id");
    }

    #[test]
    fn entity_model_resolves_paths() {
        let model = EntityModel::new("public");
        assert_eq!(model.entity_by_path("doctor").map(|e| e.table_name), Some("doctors"));
        assert!(model.entity_by_path("prescription").is_none());
        assert_eq!(model.schema(), "public");
    }
}
