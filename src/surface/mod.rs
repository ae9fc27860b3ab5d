pub(crate) mod access;
pub(crate) mod backend;
pub(crate) mod resource;
