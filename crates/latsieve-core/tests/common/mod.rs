pub mod fake_siever;
