//! Entity module - SeaORM entity definitions for every table.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod account_group;
pub mod child;
pub mod session_participant;
pub mod subscription;
pub mod subscription_type;
pub mod training_session;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use account_group::{
    Column as AccountGroupColumn, Entity as AccountGroup, Group, Model as AccountGroupModel,
};
pub use child::{Column as ChildColumn, Entity as Child, Gender, Model as ChildModel};
pub use session_participant::{
    Column as SessionParticipantColumn, Entity as SessionParticipant,
    Model as SessionParticipantModel,
};
pub use subscription::{
    Column as SubscriptionColumn, Entity as Subscription, Model as SubscriptionModel,
};
pub use subscription_type::{
    Column as SubscriptionTypeColumn, Entity as SubscriptionType, Model as SubscriptionTypeModel,
};
pub use training_session::{
    Column as TrainingSessionColumn, Entity as TrainingSession, Model as TrainingSessionModel,
};
