use docqa::services::rag::{expected_chunk_count, reconstruct, ChunkerConfig, DocumentChunker};

fn chunker(chunk_size: usize, overlap: usize, snap: bool) -> DocumentChunker {
    DocumentChunker::new(ChunkerConfig {
        chunk_size,
        overlap,
        snap_to_boundaries: snap,
    })
    .unwrap()
}

fn sample_text() -> String {
    let mut text = String::new();
    for section in 1..=12 {
        text.push_str(&format!("Section {section}\n\n"));
        for sentence in 1..=6 {
            text.push_str(&format!(
                "Sentence {sentence} of section {section} explains one more detail about the system. "
            ));
        }
        text.push_str("\n\n");
    }
    text
}

#[test]
fn test_default_settings() {
    let config = ChunkerConfig::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.overlap, 200);
    assert!(config.snap_to_boundaries);
}

#[test]
fn test_chunks_reconstruct_original_text() {
    let text = sample_text();
    for (size, overlap) in [(1000, 200), (300, 50), (120, 100), (64, 0)] {
        for snap in [true, false] {
            let chunks = chunker(size, overlap, snap).chunk("doc", &text);
            assert_eq!(reconstruct(&chunks), text, "size={size} overlap={overlap} snap={snap}");
        }
    }
}

#[test]
fn test_chunks_bounded_and_contiguous() {
    let text = sample_text();
    let chunks = chunker(300, 50, true).chunk("doc", &text);

    for (position, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, position);
        assert!(chunk.char_len() <= 300);
        assert_eq!(chunk.start, position * 250);
        assert_eq!(chunk.text.chars().count(), chunk.char_len());
    }
    for pair in chunks.windows(2) {
        assert!(pair[1].start <= pair[0].end, "gap between chunks");
    }
    assert_eq!(chunks.last().unwrap().end, text.chars().count());
}

#[test]
fn test_chunk_count_formula() {
    let text = sample_text();
    let len = text.chars().count();
    for (size, overlap) in [(1000, 200), (300, 50), (77, 13)] {
        let chunks = chunker(size, overlap, true).chunk("doc", &text);
        assert_eq!(chunks.len(), expected_chunk_count(len, size, overlap));
        assert_eq!(
            chunks.len(),
            (len - overlap).div_ceil(size - overlap),
            "size={size} overlap={overlap}"
        );
    }
}

#[test]
fn test_short_text_is_single_chunk() {
    let text = "Only a few words.";
    let chunks = chunker(1000, 200, true).chunk("doc", text);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);

    let exact = "x".repeat(1000);
    assert_eq!(chunker(1000, 200, true).chunk("doc", &exact).len(), 1);
}

#[test]
fn test_whitespace_only_text_has_no_chunks() {
    assert!(chunker(1000, 200, true).chunk("doc", "\n\n   \t").is_empty());
}

#[test]
fn test_snapping_never_splits_words() {
    let text = sample_text();
    let chars: Vec<char> = text.chars().collect();
    let chunks = chunker(300, 50, true).chunk("doc", &text);

    for chunk in &chunks[..chunks.len() - 1] {
        let at_boundary = chunk.text.ends_with('\n')
            || chars.get(chunk.end).map_or(true, |c| c.is_whitespace());
        assert!(at_boundary, "chunk {} cut mid-word", chunk.index);
    }

    let hard = chunker(300, 50, false).chunk("doc", &text);
    assert!(hard[..hard.len() - 1].iter().all(|c| c.char_len() == 300));
}

#[test]
fn test_hard_cut_without_boundaries() {
    let text = "a".repeat(2500);
    let chunks = chunker(1000, 200, true).chunk("doc", &text);

    let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
    assert_eq!(spans, vec![(0, 1000), (800, 1800), (1600, 2500)]);
}
