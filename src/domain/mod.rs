// Domain layer: draft models and ports (interfaces).

pub mod model;
pub mod ports;
