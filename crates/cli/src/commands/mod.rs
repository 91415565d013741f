pub(crate) mod catalog;
pub(crate) mod draft;
pub(crate) mod recommend;
pub(crate) mod register;
