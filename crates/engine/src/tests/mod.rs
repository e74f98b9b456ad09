mod helpers;

mod rollover_tests;
