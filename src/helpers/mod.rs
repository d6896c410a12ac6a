pub mod print_output;
