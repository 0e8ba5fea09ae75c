pub mod my_app;
pub mod office_list;
