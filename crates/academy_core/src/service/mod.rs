//! Use-case services over the store managers.

pub mod enrollment_service;
