pub mod rsaes;
