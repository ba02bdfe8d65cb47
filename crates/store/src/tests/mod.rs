mod helpers;
mod hint_tests;
