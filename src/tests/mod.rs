mod test_session_scenarios;
