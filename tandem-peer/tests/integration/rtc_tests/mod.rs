mod test_loopback_data_channel;
