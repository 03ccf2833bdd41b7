// Models module - Database entity representations

pub mod parent;
pub mod pickup_authorization;
pub mod self_checkout;
pub mod student;

pub use parent::Parent;
pub use pickup_authorization::PickupAuthorization;
pub use self_checkout::SelfCheckoutAuthorization;
pub use student::Student;
