/// Returns the cached value for `$key`, or computes it with `$block` and
/// queues it for storage with a `$ttl` in seconds.
///
/// The cache must expose `get_from_cache` and `set_in_background`.
///
/// # Example
/// ```rust,ignore
/// let record = cached!(cache, CacheKey::TrackLookup(query), TTL, async move {
///     fetch_record(&query).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
