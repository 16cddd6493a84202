pub mod attachment;
pub mod delivery_status;
pub mod recipient;
pub mod recipient_email;
pub mod recipient_list;
pub mod recipient_name;
pub mod template;
