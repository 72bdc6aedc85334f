mod agents;
mod environment;
