mod aabb_ray_cast;
mod kdtree_concurrency;
#[cfg(feature = "parallel")]
mod kdtree_parallel;
mod kdtree_scenes;
mod kdtree_serialization;
