mod test_full_handshake;
mod test_local_cache_fallback;
