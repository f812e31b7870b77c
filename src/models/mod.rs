pub mod assignment;
pub mod category;
pub mod communication;
pub mod department;
pub mod document;
pub mod history;
pub mod opinion;
pub mod remark;
pub mod request;
pub mod statistics;
pub mod status;
pub mod user;
