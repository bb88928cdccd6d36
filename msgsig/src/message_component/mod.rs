mod component;
mod component_id;
mod component_name;
mod component_param;

pub use component::MessageComponent;
pub use component_id::MessageComponentId;
pub use component_name::{DerivedComponentName, MessageComponentName};
pub use component_param::{MessageComponentParam, MessageComponentParams};
