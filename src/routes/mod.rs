pub mod analysis;
pub mod assets;
pub mod countdown;
pub mod health;
pub mod poller;
pub mod races;
pub mod results;
pub mod standings;
