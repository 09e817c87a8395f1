//! In-process request ordering: lowest `priority` first, insertion order
//! among equal priorities.
use crate::request::Request;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry {
    priority: i64,
    seq: u64,
    request: Request,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

#[derive(Debug, Default)]
pub struct RequestQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Priority is read once, at push time.
    pub fn push(&mut self, request: Request) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            priority: request.priority,
            seq,
            request,
        }));
    }

    pub fn pop(&mut self) -> Option<Request> {
        self.heap.pop().map(|Reverse(entry)| entry.request)
    }

    pub fn peek(&self) -> Option<&Request> {
        self.heap.peek().map(|Reverse(entry)| &entry.request)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Extend<Request> for RequestQueue {
    fn extend<I: IntoIterator<Item = Request>>(&mut self, iter: I) {
        for request in iter {
            self.push(request);
        }
    }
}

impl FromIterator<Request> for RequestQueue {
    fn from_iter<I: IntoIterator<Item = Request>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, priority: i64) -> Request {
        Request::builder().url(url).priority(priority).build().unwrap()
    }

    #[test]
    fn test_lowest_priority_first() {
        let mut queue: RequestQueue = [
            request("http://example.com/c", 500),
            request("http://example.com/a", 1),
            request("http://example.com/b", 300),
        ]
        .into_iter()
        .collect();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek().map(|r| r.url.as_str()), Some("http://example.com/a"));
        let order: Vec<String> = std::iter::from_fn(|| queue.pop()).map(|r| r.url).collect();
        assert_eq!(
            order,
            vec![
                "http://example.com/a",
                "http://example.com/b",
                "http://example.com/c"
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_priority_is_fifo() {
        let mut queue = RequestQueue::new();
        for i in 0..20 {
            queue.push(request(&format!("http://example.com/{}", i), 300));
        }
        queue.push(request("http://example.com/urgent", 0));

        assert_eq!(queue.pop().unwrap().url, "http://example.com/urgent");
        for i in 0..20 {
            assert_eq!(queue.pop().unwrap().url, format!("http://example.com/{}", i));
        }
        assert!(queue.pop().is_none());
    }
}
