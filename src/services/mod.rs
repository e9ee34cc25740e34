pub mod assets;
pub mod countdown;
pub mod ergast;
pub mod geo;
pub mod poller;
pub mod results;
pub mod session;
