/// Largest number of registers a single Modbus read may request.
pub const MAX_READ_COUNT: u16 = 125;

/// One read request, relative to the base address of a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSlice {
    pub offset: u16,
    pub count: u16,
}

impl RegisterSlice {
    pub fn end(&self) -> u16 {
        self.offset + self.count
    }
}

/// Group `(offset, words)` spans, sorted by offset, into as few read requests as possible.
///
/// The controller refuses to read through registers it does not map, so a gap between two spans
/// always starts a new request.
pub fn plan_reads(spans: impl IntoIterator<Item = (u16, u16)>) -> Vec<RegisterSlice> {
    let mut slices: Vec<RegisterSlice> = Vec::new();
    for (offset, words) in spans {
        match slices.last_mut() {
            Some(current)
                if current.end() == offset && current.count + words <= MAX_READ_COUNT =>
            {
                current.count += words;
            }
            _ => slices.push(RegisterSlice { offset, count: words }),
        }
    }
    slices
}

/// Number of words needed to hold every span, counting from offset zero.
pub fn span_end(spans: impl IntoIterator<Item = (u16, u16)>) -> usize {
    spans
        .into_iter()
        .map(|(offset, words)| usize::from(offset) + usize::from(words))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_registers_are_read_at_once() {
        let spans = [(0, 1), (1, 1), (2, 2), (4, 1)];
        assert_eq!(plan_reads(spans), vec![RegisterSlice { offset: 0, count: 5 }]);
        assert_eq!(span_end(spans), 5);
    }

    #[test]
    fn gaps_split_reads() {
        let spans = [(0, 1), (1, 1), (3, 2), (5, 1), (10, 1)];
        assert_eq!(
            plan_reads(spans),
            vec![
                RegisterSlice { offset: 0, count: 2 },
                RegisterSlice { offset: 3, count: 3 },
                RegisterSlice { offset: 10, count: 1 },
            ]
        );
        assert_eq!(span_end(spans), 11);
    }

    #[test]
    fn leading_offset_is_kept() {
        let spans = [(4, 2), (6, 1)];
        assert_eq!(plan_reads(spans), vec![RegisterSlice { offset: 4, count: 3 }]);
    }

    #[test]
    fn long_runs_respect_the_request_limit() {
        let spans = (0..300).map(|offset| (offset, 1));
        let slices = plan_reads(spans);
        assert_eq!(
            slices,
            vec![
                RegisterSlice { offset: 0, count: 125 },
                RegisterSlice { offset: 125, count: 125 },
                RegisterSlice { offset: 250, count: 50 },
            ]
        );
    }

    #[test]
    fn double_words_are_never_split() {
        let spans = (0..62).map(|idx| (idx * 2, 2)).chain([(124, 2)]);
        let slices = plan_reads(spans);
        assert_eq!(slices[0], RegisterSlice { offset: 0, count: 124 });
        assert_eq!(slices[1], RegisterSlice { offset: 124, count: 2 });
    }

    #[test]
    fn nothing_to_read() {
        assert!(plan_reads(std::iter::empty()).is_empty());
        assert_eq!(span_end(std::iter::empty()), 0);
    }
}
