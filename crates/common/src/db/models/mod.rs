//! SeaORM entity models

mod contact;

pub use contact::{
    Entity as ContactEntity,
    Model as Contact,
    ActiveModel as ContactActiveModel,
    Column as ContactColumn,
};
