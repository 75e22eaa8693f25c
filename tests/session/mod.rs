mod achievements;
mod connection;
mod local_progress;
mod polling;
mod submissions;
