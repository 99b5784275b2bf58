/// Optional downstream message-bus mirror. When wired in, every
/// successful release publishes `{topic:"ezekiel.lock.release",
/// data:{object_id}}` to it; its absence is silently ignored — callers pass
/// `None` and the manager simply skips the call.
pub trait ReleaseMirror: Send + Sync {
    fn publish_release(&self, object_id: &str);
}
