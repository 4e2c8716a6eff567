use crate::triangle_soup::TriangleSoup;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use kdray3d::bounding_volume::Aabb;
use kdray3d::math::{Point, Real, Vector};
use kdray3d::partitioning::kdtree::{KD_MAX_DEPTH, KD_TREE_FORMAT_VERSION, KD_TREE_TAG};
use kdray3d::partitioning::{KdBuildOptions, KdPrimitiveSet, KdTree, KdTreeIoError};
use kdray3d::query::Ray;

// Byte offsets in the serialized stream.
const VERSION_OFFSET: usize = 4 + 14;
const NODE_COUNT_OFFSET: usize = VERSION_OFFSET + 4 + 6 * 4;
const ROOT_OFFSET: usize = NODE_COUNT_OFFSET + 4;

fn scene() -> (TriangleSoup, KdTree) {
    let mut rng = oorandom::Rand32::new(42);
    let soup = TriangleSoup::random(&mut rng, 300, 20.0, 2.0);
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());
    (soup, tree)
}

fn save(tree: &KdTree) -> Vec<u8> {
    let mut bytes = vec![];
    tree.save(&mut bytes).unwrap();
    bytes
}

#[test]
fn save_load_round_trip() {
    let (soup, tree) = scene();
    assert!(!tree.nodes()[0].is_leaf());

    let bytes = save(&tree);
    assert_eq!(LittleEndian::read_u32(&bytes[0..4]) as usize, KD_TREE_TAG.len());
    assert_eq!(
        LittleEndian::read_u32(&bytes[VERSION_OFFSET..]),
        KD_TREE_FORMAT_VERSION
    );

    let loaded = KdTree::load(&bytes[..], soup.primitive_count(), |i| soup.aabb(i)).unwrap();
    loaded.assert_well_formed();
    assert_eq!(loaded.nodes(), tree.nodes());
    assert_eq!(loaded.primitives(), tree.primitives());
    assert_eq!(loaded.stats(), tree.stats());

    let mut rng = oorandom::Rand32::new(7);
    for _ in 0..500 {
        let origin = Point::new(rng.rand_float(), rng.rand_float(), -0.5) * 20.0;
        let target = Point::new(rng.rand_float(), rng.rand_float(), rng.rand_float()) * 20.0;
        let ray = Ray::new(origin, target - origin);

        assert_eq!(
            loaded.cast_ray_on(&soup, &ray, Real::MAX),
            tree.cast_ray_on(&soup, &ray, Real::MAX)
        );
    }

    // Saving the loaded tree gives the same bytes.
    assert_eq!(save(&loaded), bytes);
}

#[test]
fn save_load_trivial_trees() {
    let empty = save(&KdTree::new());
    let loaded = KdTree::load(&empty[..], 0, |_| unreachable!()).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(LittleEndian::read_u32(&empty[NODE_COUNT_OFFSET..]), 0);
    assert_eq!(empty.len(), ROOT_OFFSET);

    let aabb = Aabb::new(Point::origin(), Point::new(1.0, 1.0, 1.0));
    let single = KdTree::build([3], |_| aabb, |_| 1.0, &KdBuildOptions::default());
    let loaded = KdTree::load(&save(&single)[..], 4, |_| aabb).unwrap();
    assert_eq!(loaded.nodes(), single.nodes());
    assert_eq!(loaded.primitives(), &[3]);
}

#[test]
fn load_rejects_malformed_streams() {
    let (soup, tree) = scene();
    let bytes = save(&tree);
    let load = |bytes: &[u8]| KdTree::load(bytes, soup.primitive_count(), |i| soup.aabb(i));

    assert!(matches!(load(&[]), Err(KdTreeIoError::Io(_))));
    assert!(matches!(
        load(&bytes[..bytes.len() - 1]),
        Err(KdTreeIoError::Io(_))
    ));
    assert!(matches!(
        load(&bytes[..ROOT_OFFSET + 10]),
        Err(KdTreeIoError::Io(_))
    ));

    let mut corrupted = bytes.clone();
    corrupted[4] = b'K';
    assert!(matches!(load(&corrupted), Err(KdTreeIoError::InvalidTag)));

    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[0..4], 3);
    assert!(matches!(load(&corrupted), Err(KdTreeIoError::InvalidTag)));

    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[VERSION_OFFSET..], 2);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::UnsupportedVersion(2))
    ));

    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[ROOT_OFFSET..], 5);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::UnexpectedNodeId {
            expected: 0,
            found: 5
        })
    ));

    // The root is an inner node: id, flag, axis, split, left, right.
    let mut corrupted = bytes.clone();
    corrupted[ROOT_OFFSET + 4] = 9;
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::InvalidNodeFlag(9))
    ));

    let mut corrupted = bytes.clone();
    corrupted[ROOT_OFFSET + 5] = 3;
    assert!(matches!(load(&corrupted), Err(KdTreeIoError::InvalidAxis(3))));

    let mut corrupted = bytes.clone();
    LittleEndian::write_f32(&mut corrupted[ROOT_OFFSET + 6..], Real::NAN);
    assert!(matches!(load(&corrupted), Err(KdTreeIoError::InvalidSplit(0))));

    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[ROOT_OFFSET + 10..], 2);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::UnexpectedNodeId {
            expected: 1,
            found: 2
        })
    ));

    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[ROOT_OFFSET + 14..], 1);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::UnexpectedNodeId { found: 1, .. })
    ));

    let node_count = tree.nodes().len() as u32;
    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[NODE_COUNT_OFFSET..], node_count + 1);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::NodeCountMismatch { .. })
    ));

    let mut corrupted = bytes.clone();
    LittleEndian::write_u32(&mut corrupted[NODE_COUNT_OFFSET..], node_count - 1);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::NodeCountMismatch { .. })
    ));

    let mut corrupted = bytes.clone();
    corrupted.push(0);
    assert!(matches!(load(&corrupted), Err(KdTreeIoError::TrailingData)));

    // Out of range ids are rejected before reaching the box callback, which would panic.
    let mut corrupted = bytes.clone();
    let first_id = first_primitive_offset(&tree);
    LittleEndian::write_u32(&mut corrupted[first_id..], 999_999);
    assert!(matches!(
        load(&corrupted),
        Err(KdTreeIoError::InvalidPrimitive(999_999))
    ));

    assert!(matches!(
        KdTree::load(&bytes[..], 1, |i| soup.aabb(i)),
        Err(KdTreeIoError::InvalidPrimitive(_))
    ));
}

// The offset of the first primitive id of the first non-empty leaf.
fn first_primitive_offset(tree: &KdTree) -> usize {
    let mut offset = ROOT_OFFSET;
    for node in tree.nodes() {
        // Node id and leaf flag.
        offset += 5;
        if node.is_leaf() {
            if !tree.leaf_primitives(node).is_empty() {
                return offset + 4;
            }
            offset += 4;
        } else {
            offset += 13;
        }
    }
    unreachable!("the tree has no primitive")
}

#[test]
fn load_detects_stale_geometry() {
    let (soup, tree) = scene();
    let bytes = save(&tree);

    let moved = KdTree::load(&bytes[..], soup.primitive_count(), |i| {
        let aabb = soup.aabb(i);
        Aabb::new(aabb.mins + Vector::x(), aabb.maxs + Vector::x())
    });
    assert!(matches!(moved, Err(KdTreeIoError::CorruptedBounds)));
}

#[test]
fn load_rejects_overly_deep_trees() {
    let mut bytes = vec![];
    bytes.write_u32::<LittleEndian>(KD_TREE_TAG.len() as u32).unwrap();
    bytes.extend_from_slice(KD_TREE_TAG.as_bytes());
    bytes.write_u32::<LittleEndian>(KD_TREE_FORMAT_VERSION).unwrap();
    for value in [0.0, 0.0, 0.0, 1.0, 1.0, 1.0] {
        bytes.write_f32::<LittleEndian>(value).unwrap();
    }
    bytes.write_u32::<LittleEndian>(1000).unwrap();

    // A chain of inner nodes, each being the left child of the previous one.
    for id in 0..KD_MAX_DEPTH + 10 {
        bytes.write_u32::<LittleEndian>(id).unwrap();
        bytes.write_u8(0).unwrap();
        bytes.write_u8(0).unwrap();
        bytes.write_f32::<LittleEndian>(0.5).unwrap();
        bytes.write_u32::<LittleEndian>(id + 1).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();
    }

    let aabb = Aabb::new(Point::origin(), Point::new(1.0, 1.0, 1.0));
    assert!(matches!(
        KdTree::load(&bytes[..], 1, |_| aabb),
        Err(KdTreeIoError::TooDeep(_))
    ));
}
