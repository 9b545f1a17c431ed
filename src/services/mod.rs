pub(crate) mod balancer;
pub(crate) mod enrollment;
pub(crate) mod errors;
pub(crate) mod lifecycle;
pub(crate) mod notifications;
pub(crate) mod session_projector;
pub(crate) mod set_generator;
pub(crate) mod set_inspection;
pub(crate) mod statistics;
