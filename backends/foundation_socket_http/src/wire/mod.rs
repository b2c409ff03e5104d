pub mod socket_http;
