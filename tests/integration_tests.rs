mod integration {
    mod cli_tests;
    mod common;
    mod config_tests;
    mod enumeration_tests;
    mod restore_tests;
    mod scenario_tests;
}
