pub mod admin;
pub mod booking;
pub mod customer;
pub mod meeting;
pub mod payment;
pub mod recap_run;
pub mod service;
pub mod service_media;
