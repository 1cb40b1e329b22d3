mod components;
mod containers;

pub use components::{cmd_components_new, cmd_components_regenerate};
pub use containers::{cmd_containers_build, cmd_containers_new};
