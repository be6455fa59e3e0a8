mod catalog;
mod completion;
mod helpers;
mod mocks;
mod orders;
mod webhooks;
