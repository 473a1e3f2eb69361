pub mod did_exchange;
