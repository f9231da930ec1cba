// Domain layer: records flowing through the pipeline and the ports the adapters implement.

pub mod model;
pub mod ports;
