pub(crate) mod assignments;
pub(crate) mod candidates;
pub(crate) mod exams;
pub(crate) mod question_sets;
pub(crate) mod questions;
