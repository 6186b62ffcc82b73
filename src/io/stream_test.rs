#[cfg(test)]
mod tests {
    use crate::error::GraphSetError;
    use crate::graph::{Edge, Graph, Node};
    use crate::io::stream::{for_each_message, write_messages, MessageWriter};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn chunk(first_id: u64) -> Graph {
        Graph {
            nodes: vec![Node::new(first_id, "ACGT"), Node::new(first_id + 1, "GG")],
            edges: vec![Edge::simple(first_id, first_id + 1)],
            paths: Vec::new(),
        }
    }

    #[test]
    fn test_messages_come_back_in_order() {
        let chunks = vec![chunk(1), chunk(3), chunk(5)];
        let bytes = write_messages(Vec::new(), &chunks).unwrap();

        let mut seen = Vec::new();
        let count = for_each_message(Cursor::new(bytes), |g: Graph| {
            seen.push(g);
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 3);
        assert_eq!(seen, chunks);
    }

    #[test]
    fn test_empty_stream_has_no_messages() {
        let bytes = MessageWriter::new(Vec::new()).finish().unwrap();
        let count = for_each_message(Cursor::new(bytes), |_: Graph| Ok(())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_concatenated_streams_are_read_as_one() {
        let mut bytes = write_messages(Vec::new(), &[chunk(1)]).unwrap();
        bytes.extend(write_messages(Vec::new(), &[chunk(10)]).unwrap());

        let mut ids = Vec::new();
        for_each_message(Cursor::new(bytes), |g: Graph| {
            ids.push(g.nodes[0].id);
            Ok(())
        })
        .unwrap();
        assert_eq!(ids, vec![1, 10]);
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        // Header promises 100 bytes, only 3 follow
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&100u64.to_le_bytes()).unwrap();
        encoder.write_all(&[1, 2, 3]).unwrap();
        let bytes = encoder.finish().unwrap();

        let result = for_each_message(Cursor::new(bytes), |_: Graph| Ok(()));
        assert!(matches!(result, Err(GraphSetError::Io(_))));
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&u64::MAX.to_le_bytes()).unwrap();
        let bytes = encoder.finish().unwrap();

        let result = for_each_message(Cursor::new(bytes), |_: Graph| Ok(()));
        assert!(matches!(result, Err(GraphSetError::FrameTooLarge(_))));
    }

    #[test]
    fn test_handler_error_stops_decoding() {
        let bytes = write_messages(Vec::new(), &[chunk(1), chunk(3)]).unwrap();
        let mut calls = 0;
        let result = for_each_message(Cursor::new(bytes), |_: Graph| {
            calls += 1;
            Err(GraphSetError::RepeatedStdin)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
