//! Built-in search fields beyond the event's own columns

use super::entry::{DateBound, FieldDescriptor, Projection};
use trail_foundation::{
    IdentityAttribute, COL_ACTOR_ID, COL_ACTOR_LOGIN, COL_ACTOR_ROLES, COL_CREATED,
};

/// `(field name, metadata key)`
pub const META_FIELDS: &[(&str, &str)] = &[
    ("post_title", "PostTitle"),
    ("post_status", "PostStatus"),
    ("post_type", "PostType"),
    ("post_id", "PostID"),
];

/// `(alias, target field)`
pub const ALIASES: &[(&str, &str)] = &[("post_name", "post_title")];

/// `(field name, attribute looked up)`; all project to actor id and login
const IDENTITY_MATCH_FIELDS: &[(&str, IdentityAttribute)] = &[
    ("user_id", IdentityAttribute::Id),
    ("user_email", IdentityAttribute::Email),
    ("user_first_name", IdentityAttribute::FirstName),
    ("user_last_name", IdentityAttribute::LastName),
];

pub const ROLE_FIELD: &str = "user_role";
pub const START_DATE_FIELD: &str = "start_date";
pub const END_DATE_FIELD: &str = "end_date";

pub fn meta_fields() -> Vec<FieldDescriptor> {
    META_FIELDS
        .iter()
        .map(|(name, key)| FieldDescriptor::meta(*name, *key))
        .collect()
}

pub fn identity_fields() -> Vec<FieldDescriptor> {
    let mut fields: Vec<FieldDescriptor> = IDENTITY_MATCH_FIELDS
        .iter()
        .map(|(name, attribute)| {
            FieldDescriptor::identity_match(*name, *attribute, actor_projection())
        })
        .collect();
    fields.push(FieldDescriptor::identity_role(ROLE_FIELD, COL_ACTOR_ROLES));
    fields
}

pub fn date_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::date(START_DATE_FIELD, COL_CREATED, DateBound::Start),
        FieldDescriptor::date(END_DATE_FIELD, COL_CREATED, DateBound::End),
    ]
}

/// identity → `{actor_id: <id>, actor_login: <login>}`
fn actor_projection() -> Vec<Projection> {
    vec![
        Projection::new(COL_ACTOR_ID, IdentityAttribute::Id),
        Projection::new(COL_ACTOR_LOGIN, IdentityAttribute::Login),
    ]
}
