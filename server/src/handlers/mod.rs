pub mod review_handlers;
