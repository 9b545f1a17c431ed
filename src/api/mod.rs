pub(crate) mod candidates;
pub(crate) mod errors;
pub(crate) mod exam_sets;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod router;
