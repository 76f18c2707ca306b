mod common;
mod documents;
mod fetch;
mod health;
