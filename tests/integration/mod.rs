mod graph;
mod lifecycle;
mod notifications;
mod processing;
mod transport;
