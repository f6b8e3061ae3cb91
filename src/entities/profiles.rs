use sea_orm::entity::prelude::*;

/// A birth profile: the subject every cached chart artifact is about.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning user. Opaque id from the identity provider, no foreign key.
    pub user_id: String,

    pub name: String,

    /// `YYYY-MM-DD`
    pub birth_date: String,

    /// `HH:MM` or `HH:MM:SS`, local to `timezone`
    pub birth_time: String,

    pub birth_place: Option<String>,

    pub latitude: f64,

    pub longitude: f64,

    pub timezone: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
