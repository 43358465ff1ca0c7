pub mod open_data;
pub mod pet_store;
