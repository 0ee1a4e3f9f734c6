//! Collections used by the handlers.

use bson::oid::ObjectId;
use bson::Bson;
use web_toolset::{Collection, Field};

pub struct User;

impl User {
    pub const UID_FIELD: &'static str = "uid";
    pub const NAME_FIELD: &'static str = "name";
    pub const AGE_FIELD: &'static str = "age";
    pub const CREATED_FIELD: &'static str = "created";
}

fn new_uid() -> Bson {
    Bson::String(ObjectId::new().to_hex())
}

fn now() -> Bson {
    Bson::DateTime(bson::DateTime::now())
}

impl Collection for User {
    const NAME: &'static str = "user";

    fn fields() -> Vec<(&'static str, Field)> {
        vec![
            (User::UID_FIELD, Field::with_producer(new_uid).unique()),
            (User::NAME_FIELD, Field::new()),
            (User::AGE_FIELD, Field::with_default(18)),
            (User::CREATED_FIELD, Field::with_producer(now)),
        ]
    }
}
