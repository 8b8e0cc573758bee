pub mod sstt;
