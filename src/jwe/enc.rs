pub mod aes_cbc_hmac;
pub mod aes_gcm;
