pub mod segment_server;
